mod element_tests;
